//! # Trial Reconciler: Experiment-to-Trial Reconciliation Core
//!
//! Turns a declarative hyperparameter-search `Experiment` into concrete
//! `Trial` resources, and tears experiment-owned state down safely when the
//! experiment is deleted.
//!
//! ## Components
//!
//! - [`template`]: pure `{{ name }}` substitution of parameter assignments
//! - [`collector`]: metrics-collector spec derived from the objective
//! - [`factory`]: assembles, links and persists one trial per suggestion
//! - [`finalizer`]: finalizer state machine gating deletion on history purge
//!
//! The watch loop, the real cluster store and the history database sit
//! outside this crate behind the traits in [`store`] and [`owner`].
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use trial_reconciler::config::ControllerConfig;
//! use trial_reconciler::factory::TrialFactory;
//! use trial_reconciler::resource::{Experiment, Objective, ObjectiveType, ParameterAssignment, TrialTemplate};
//! use trial_reconciler::store::MemoryResourceStore;
//!
//! let store = Arc::new(MemoryResourceStore::new());
//! let mut experiment = Experiment::new("ns", "exp1");
//! experiment.spec.objective = Objective::new(ObjectiveType::Maximize, "accuracy");
//! experiment.spec.trial_template = Some(TrialTemplate::new(
//!     "apiVersion: batch/v1\nkind: Job\nmetadata:\n  name: {{trial.name}}\nargs: [--lr={{lr}}]\n",
//! ));
//! let experiment = store.insert_experiment(experiment);
//!
//! let factory = TrialFactory::new(ControllerConfig::default(), store.clone());
//! let trial = factory.create_trial(&experiment, &[ParameterAssignment::new("lr", "0.1")])?;
//!
//! assert!(trial.name().starts_with("exp1-"));
//! assert_eq!(store.trial_count(), 1);
//! # Ok::<(), trial_reconciler::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod collector;
pub mod config;
pub mod error;
pub mod factory;
pub mod finalizer;
pub mod logging;
pub mod naming;
pub mod owner;
pub mod resource;
pub mod store;
pub mod template;

pub use error::{Error, Result};
pub use factory::TrialFactory;
pub use finalizer::{FinalizerLifecycleManager, FinalizerState, ReconcileResult};
