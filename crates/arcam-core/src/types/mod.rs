mod observation;

pub use observation::*;
