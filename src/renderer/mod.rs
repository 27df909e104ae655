//! Rendering sessions
//!
//! The harvest core talks to the catalog through the [`Renderer`] and
//! [`SessionFactory`] traits. [`HttpSessionFactory`] is the bundled
//! implementation for catalogs that serve pre-rendered markup.

mod http;
mod identity;
mod traits;

pub use http::{build_http_client, HttpSession, HttpSessionFactory};
pub use identity::IdentityProfile;
pub use traits::{RenderError, RenderResult, Renderer, SessionFactory, WaitStrategy};
