pub mod directory;
pub mod schedule;

pub use directory::DirectoryService;
pub use schedule::ScheduleService;
