//! # Eventbook Core
//!
//! Core traits and types shared by every Eventbook crate.
//!
//! The booking backend follows a "functional core, imperative shell" layout:
//! business rules live in pure reducers that mutate an in-memory aggregate,
//! while loading, conditional saving and retrying belong to the runtime.
//!
//! ## Core Concepts
//!
//! - **Aggregate**: a consistency boundary persisted as one document
//!   (an event together with its ticket types and bookings)
//! - **Action**: a request to change an aggregate
//! - **Reducer**: `(State, Action, Environment) → Result<Output, Error>`
//! - **Environment**: injected dependencies such as the [`environment::Clock`]
//! - **Version**: optimistic concurrency stamp carried by every stored aggregate
//!
//! ## Example
//!
//! ```ignore
//! use eventbook_core::reducer::Reducer;
//!
//! impl Reducer for CounterReducer {
//!     type State = Counter;
//!     type Action = CounterAction;
//!     type Environment = ();
//!     type Output = i64;
//!     type Error = CounterError;
//!
//!     fn reduce(&self, state: &mut Counter, action: CounterAction, _env: &()) -> Result<i64, CounterError> {
//!         match action {
//!             CounterAction::Add(n) => {
//!                 state.value += n;
//!                 Ok(state.value)
//!             }
//!         }
//!     }
//! }
//! ```

pub mod store;
pub mod version;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use store::{Aggregate, AggregateStore, StoreError, StoreFuture, Versioned};
pub use version::Version;

/// Reducer module - the core trait for business logic.
pub mod reducer {
    /// The Reducer trait - core abstraction for business logic
    ///
    /// A reducer validates an action against the current state and, when the
    /// action is accepted, mutates the state in place and returns an output
    /// describing what happened.
    ///
    /// # Contract
    ///
    /// - Reducers perform no I/O; everything external comes from the environment.
    /// - Returning `Err` means the action was rejected. Callers discard the
    ///   state they passed in, so a reducer may bail out halfway through.
    /// - Reducers may be invoked several times for the same action when the
    ///   runtime retries after a concurrency conflict, so they must be
    ///   deterministic with respect to `(state, action, environment)`.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Result of an accepted action
        type Output;

        /// Rejection reason for a refused action
        type Error;

        /// Reduce an action into a state change.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action violates a business rule.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<Self::Output, Self::Error>;
    }
}

/// Environment module - dependency injection traits.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use eventbook_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let first = clock.now();
    /// assert!(clock.now() >= first);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
