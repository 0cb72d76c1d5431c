//! Pipeline stages for turning submissions into LaTeX.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ converter ──▶ extract ──▶ render
//! (dir scan)   (pandoc)      (tables)    (LaTeX lines)
//!                  ▲            │            │
//!                  └─ normalize ◀────────────┘
//! ```
//!
//! 1. [`discover`]: list submissions, pair figures by base name
//! 2. [`converter`]: the external converter behind [`converter::DocumentConverter`]
//! 3. [`extract`]: positional table layout → [`crate::record::SubmissionRecord`]
//! 4. [`normalize`]: fragment → LaTeX text plus the substitution table
//! 5. [`render`]: record → `posterabs*` environment lines
//! 6. [`figure`]: figure pixel dimensions

pub mod converter;
pub mod discover;
pub mod extract;
pub mod figure;
pub mod normalize;
pub mod render;
