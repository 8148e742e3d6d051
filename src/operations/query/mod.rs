mod validate;

pub use validate::ValidateTopology;
