pub mod executor;
pub mod filesystem;
pub mod library;
pub mod prompt;

pub use executor::LocalExecutor;
pub use filesystem::LocalFileTree;
pub use library::DirectoryLibrary;
pub use prompt::TerminalConfirm;
