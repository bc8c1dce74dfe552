pub mod auth;
pub mod file_access;
pub mod file_delete;
pub mod file_list;
pub mod file_upload;
pub mod health;
pub mod storage_info;
