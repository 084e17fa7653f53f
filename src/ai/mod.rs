//! External AI collaborator interfaces
//!
//! The synchronization core treats AI services as opaque collaborators
//! behind two single-method traits: one that locates a changed section's
//! counterpart in the target outline, one that translates section-scoped
//! content. Both are fallible and latent by contract; callers impose
//! timeouts and downgrade failures instead of aborting a run.
//!
//! A shared OpenAI-compatible chat provider implements both traits for real
//! use, and deterministic mocks implement them for tests.

pub mod chat;
pub mod error;
pub mod matcher;
pub mod mock;
pub mod translator;

pub use chat::ChatCompletionProvider;
pub use error::{AiError, AiResult};
pub use matcher::{LocateRequest, LocateResponse, MatchCandidate, SectionLocator};
pub use mock::{LocatorMode, MockLocator, MockTranslator, TranslateMode};
pub use translator::{TranslateRequest, Translator};
