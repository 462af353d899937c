//! Trial template rendering
//!
//! Substitutes `{{ name }}` placeholders in a workload template with
//! parameter assignments. Rendering is pure: identical inputs always produce
//! identical text, so a trial re-created after a transient failure carries
//! the same manifest.
//!
//! ## Grammar
//!
//! ```text
//! template    := (text | placeholder)*
//! placeholder := "{{" ws* name ws* "}}"
//! name        := [A-Za-z0-9_.-]+
//! ```
//!
//! ## Example
//!
//! ```rust
//! use trial_reconciler::resource::ParameterAssignment;
//! use trial_reconciler::template::render;
//!
//! let manifest = render(
//!     "args: [--lr={{ lr }}]",
//!     &[ParameterAssignment::new("lr", "0.1")],
//! )?;
//! assert_eq!(manifest, "args: [--lr=0.1]");
//! # Ok::<(), trial_reconciler::template::RenderError>(())
//! ```

use thiserror::Error;

use crate::resource::ParameterAssignment;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Built-in placeholder resolving to the trial name.
pub const TRIAL_NAME: &str = "trial.name";
/// Built-in placeholder resolving to the trial namespace.
pub const TRIAL_NAMESPACE: &str = "trial.namespace";
/// Built-in placeholder resolving to the experiment name.
pub const EXPERIMENT_NAME: &str = "experiment.name";

/// Template rendering failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Placeholder has no matching assignment or built-in
    #[error("unresolved placeholder {{{{{name}}}}} at byte {offset}")]
    UnresolvedPlaceholder {
        /// Placeholder name
        name: String,
        /// Byte offset of the opening braces
        offset: usize,
    },

    /// Placeholder body is empty or contains characters outside the name set
    #[error("invalid placeholder {{{{{body}}}}} at byte {offset}")]
    InvalidPlaceholder {
        /// Raw text between the braces
        body: String,
        /// Byte offset of the opening braces
        offset: usize,
    },

    /// `{{` without a matching `}}`
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated {
        /// Byte offset of the opening braces
        offset: usize,
    },
}

/// Values a template can reference.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    assignments: &'a [ParameterAssignment],
    trial_name: Option<&'a str>,
    trial_namespace: Option<&'a str>,
    experiment_name: Option<&'a str>,
}

impl<'a> TemplateContext<'a> {
    /// Context holding only parameter assignments.
    #[must_use]
    pub const fn new(assignments: &'a [ParameterAssignment]) -> Self {
        Self {
            assignments,
            trial_name: None,
            trial_namespace: None,
            experiment_name: None,
        }
    }

    /// Add trial and experiment identity for the built-in placeholders.
    #[must_use]
    pub const fn with_identity(
        mut self,
        experiment_name: &'a str,
        trial_name: &'a str,
        trial_namespace: &'a str,
    ) -> Self {
        self.experiment_name = Some(experiment_name);
        self.trial_name = Some(trial_name);
        self.trial_namespace = Some(trial_namespace);
        self
    }

    fn lookup(&self, name: &str) -> Option<&'a str> {
        // First assignment wins on duplicate names.
        if let Some(assignment) = self.assignments.iter().find(|a| a.name == name) {
            return Some(assignment.value.as_str());
        }
        match name {
            TRIAL_NAME => self.trial_name,
            TRIAL_NAMESPACE => self.trial_namespace,
            EXPERIMENT_NAME => self.experiment_name,
            _ => None,
        }
    }
}

/// Render a template against parameter assignments only.
///
/// # Errors
///
/// Returns `RenderError` if a placeholder is malformed, unterminated, or
/// names a parameter with no assignment.
pub fn render(template: &str, assignments: &[ParameterAssignment]) -> Result<String, RenderError> {
    render_with(template, &TemplateContext::new(assignments))
}

/// Render a template against a full context, including built-in identity
/// placeholders.
///
/// # Errors
///
/// Returns `RenderError` if a placeholder is malformed, unterminated, or
/// cannot be resolved from the context.
pub fn render_with(template: &str, context: &TemplateContext<'_>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let offset = consumed + start;
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or(RenderError::Unterminated { offset })?;

        let body = &after_open[..end];
        let name = body.trim();
        if !is_valid_name(name) {
            return Err(RenderError::InvalidPlaceholder {
                body: body.to_string(),
                offset,
            });
        }

        let value = context
            .lookup(name)
            .ok_or_else(|| RenderError::UnresolvedPlaceholder {
                name: name.to_string(),
                offset,
            })?;
        out.push_str(value);

        let advance = start + OPEN.len() + end + CLOSE.len();
        consumed += advance;
        rest = &rest[advance..];
    }

    out.push_str(rest);
    Ok(out)
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}
