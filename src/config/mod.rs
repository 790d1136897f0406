pub mod defaults;
mod policy;

pub use policy::Policy;
