//! Benchmark case descriptors.
//!
//! A case is a data record: a name, an optional one-time setup, a body and the
//! number of measured invocations. Setup produces per-case state that the body
//! borrows mutably on every invocation, so a case can time lookups against a
//! structure it built up front without paying for the build.

use crate::error::{Error, Result};

/// Executes one case's setup and body.
///
/// Implemented by [`PreparedRoutine`]; custom implementations can be boxed
/// into a [`BenchmarkCase`] with [`BenchmarkCase::from_routine`].
pub trait CaseRoutine {
    /// Run the one-time setup. Calling it again after it succeeded is a no-op.
    ///
    /// # Errors
    ///
    /// Returns whatever the setup step returns.
    fn prepare(&mut self) -> Result<()>;

    /// Invoke the body once, returning a value that keeps the work observable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotPrepared`] if called before [`Self::prepare`]
    /// succeeded, or the body's own error.
    fn invoke(&mut self) -> Result<u64>;
}

/// A setup closure paired with a body closure over the state it produces.
pub struct PreparedRoutine<S, Setup, Body> {
    setup: Option<Setup>,
    state: Option<S>,
    body: Body,
}

impl<S, Setup, Body> PreparedRoutine<S, Setup, Body>
where
    Setup: FnOnce() -> Result<S>,
    Body: FnMut(&mut S) -> Result<u64>,
{
    /// Pair a setup step with a body.
    pub const fn new(setup: Setup, body: Body) -> Self {
        Self {
            setup: Some(setup),
            state: None,
            body,
        }
    }
}

impl<S, Setup, Body> CaseRoutine for PreparedRoutine<S, Setup, Body>
where
    Setup: FnOnce() -> Result<S>,
    Body: FnMut(&mut S) -> Result<u64>,
{
    fn prepare(&mut self) -> Result<()> {
        // FnOnce: taken out on first call, so setup can never run twice
        match self.setup.take() {
            Some(setup) => {
                self.state = Some(setup()?);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn invoke(&mut self) -> Result<u64> {
        match self.state.as_mut() {
            Some(state) => (self.body)(state),
            None => Err(Error::NotPrepared),
        }
    }
}

/// A named, independently measurable unit of work.
pub struct BenchmarkCase {
    name: String,
    workload: Option<String>,
    iterations: u64,
    routine: Box<dyn CaseRoutine>,
}

impl BenchmarkCase {
    /// Create a case without setup.
    ///
    /// # Examples
    ///
    /// ```
    /// # use perfdemo_core::BenchmarkCase;
    /// let case = BenchmarkCase::new("List Add & Sum", || {
    ///     let list: Vec<u64> = (0..10_000).collect();
    ///     Ok(list.iter().sum())
    /// })
    /// .iterations(3);
    /// assert_eq!(case.name(), "List Add & Sum");
    /// assert_eq!(case.iteration_count(), 3);
    /// ```
    pub fn new<F>(name: impl Into<String>, mut body: F) -> Self
    where
        F: FnMut() -> Result<u64> + 'static,
    {
        Self::with_setup(name, || Ok(()), move |_: &mut ()| body())
    }

    /// Create a case whose body runs against state built once by `setup`.
    ///
    /// The setup cost is never included in the measured time.
    pub fn with_setup<S, Setup, Body>(name: impl Into<String>, setup: Setup, body: Body) -> Self
    where
        S: 'static,
        Setup: FnOnce() -> Result<S> + 'static,
        Body: FnMut(&mut S) -> Result<u64> + 'static,
    {
        Self::from_routine(name, PreparedRoutine::new(setup, body))
    }

    /// Wrap a custom [`CaseRoutine`].
    pub fn from_routine(name: impl Into<String>, routine: impl CaseRoutine + 'static) -> Self {
        Self {
            name: name.into(),
            workload: None,
            iterations: 1,
            routine: Box::new(routine),
        }
    }

    /// Set the number of measured invocations (at least 1).
    #[must_use]
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Attach a workload label shown next to the name, e.g. `10,000 items`.
    #[must_use]
    pub fn workload(mut self, label: impl Into<String>) -> Self {
        self.workload = Some(label.into());
        self
    }

    /// Case name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Workload label, if any.
    #[must_use]
    pub fn workload_label(&self) -> Option<&str> {
        self.workload.as_deref()
    }

    /// Number of measured invocations.
    #[must_use]
    pub const fn iteration_count(&self) -> u64 {
        self.iterations
    }

    pub(crate) fn prepare(&mut self) -> Result<()> {
        self.routine.prepare()
    }

    pub(crate) fn invoke(&mut self) -> Result<u64> {
        self.routine.invoke()
    }
}

impl std::fmt::Debug for BenchmarkCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkCase")
            .field("name", &self.name)
            .field("workload", &self.workload)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}
