pub mod error;
pub use error::Result;
pub use error::Error;

pub mod package;
pub use package::Package;
pub mod iterator;

pub mod available_package;
pub use available_package::AvailablePackage;
pub mod installed_package;
pub use installed_package::InstalledPackage;

pub mod registry;
pub use registry::Registry;
pub use registry::RegistryHandle;

pub mod config;
pub use config::Config;

pub mod compatibility_sorter;
pub use compatibility_sorter::CompatibilitySorter;
pub mod relationship_resolver;
pub mod sanity_checker;
pub mod reverse_dependencies;
