// Domain-layer modules and shared errors/models
pub mod schema {
    pub use crate::schema::*;
}

pub mod preprocessing {
    pub use crate::preprocessing::*;
}

pub mod classifier {
    pub use crate::classifier::*;
}

pub mod batch {
    pub use crate::batch::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
