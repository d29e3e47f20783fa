pub mod routes;
pub mod task_dto;
pub mod task_handlers;
#[cfg(test)]
pub mod task_memory_store;
pub mod task_models;
pub mod task_repository;
pub mod task_service;
pub mod task_store;

pub use task_dto::{CreateTaskRequest, LeadOptionsResponse, UpdateTaskRequest, UpdateTaskStatusRequest};
pub use task_models::{Task, TaskStatus};
pub use task_repository::PgTaskRepository;
pub use task_service::TaskService;
pub use task_store::{CandidateWindow, TaskStore};
#[cfg(test)]
pub use task_models::TaskChanges;
