//! dalkit — an async data-access toolkit for Postgres-backed axum
//! services.
//!
//! This facade crate re-exports the dalkit sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use dalkit::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Crate                          |
//! |------------|---------|--------------------------------|
//! | `data`     | **yes** | `dalkit-data` (abstractions)   |
//! | `postgres` | no      | `dalkit-data-sqlx`             |
//! | `web`      | no      | `dalkit-web`                   |
//! | `full`     | no      | All of the above               |

#[cfg(feature = "data")]
pub use dalkit_data;

#[cfg(feature = "postgres")]
pub use dalkit_data_sqlx;

#[cfg(feature = "web")]
pub use dalkit_web;

/// Re-exports of the most commonly used types across the enabled
/// sub-crates.
pub mod prelude {
    #[cfg(feature = "data")]
    pub use dalkit_data::prelude::*;

    #[cfg(feature = "postgres")]
    pub use dalkit_data_sqlx::prelude::*;

    #[cfg(feature = "web")]
    pub use dalkit_web::prelude::*;
}
