mod address_policy;

pub use address_policy::PolicySet;
