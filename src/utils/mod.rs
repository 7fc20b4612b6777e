pub mod file_helpers;
