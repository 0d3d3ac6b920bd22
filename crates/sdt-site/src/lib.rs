//! SD&T Law site interactions and visual snapshot harness.
//!
//! The firm's single landing page ships one copy of every section per
//! breakpoint and hides the ones that do not apply. This crate holds the
//! page-side controllers that have to cope with that duplication (bio
//! overlay, mobile menu, in-page anchors), an in-process page to run them
//! against, and the snapshot harness that checks the semantic rebuild still
//! paints like the page-builder export.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         SiteRuntime                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐   │
//! │  │ Overlay      │  │ Menu         │  │ AnchorNavigator       │   │
//! │  │ Controller   │  │ Controller   │  │                       │   │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────┬────────────┘   │
//! │         └─────────────────┼─────────────────────┘                │
//! │                  VisibilityResolver                              │
//! │                           │                                      │
//! │   Page: Document ─ Layout ─ Window ─ Scheduler ─ Raster          │
//! └──────────────────────────────────────────────────────────────────┘
//!                             ▲
//!             harness: PageDriver ─ Scene ─ SuiteRunner
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod anchor;
pub mod animation;
pub mod attorney;
pub mod breakpoint;
pub mod config;
pub mod dom;
pub mod fixture;
pub mod harness;
pub mod layout;
pub mod menu;
pub mod overlay;
pub mod page;
pub mod raster;
pub mod resolver;
pub mod result;
pub mod runtime;
pub mod scheduler;
pub mod selector;
pub mod template;
pub mod view;
pub mod window;

pub use anchor::AnchorNavigator;
pub use attorney::{AttorneyRecord, Roster};
pub use breakpoint::{Breakpoint, DeviceProfile, Viewport};
pub use config::Timings;
pub use dom::{Document, NodeId};
pub use fixture::Markup;
pub use layout::Rect;
pub use menu::{MenuController, MenuSelectors, MenuState};
pub use overlay::{OverlayController, OverlayState, Placement};
pub use page::Page;
pub use resolver::VisibilityResolver;
pub use result::{SiteError, SiteResult};
pub use runtime::SiteRuntime;
pub use selector::SelectorList;
pub use window::Behavior;
