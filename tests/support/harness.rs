//! Mock GitHub server driven from synchronous BDD steps.

use std::future::Future;
use std::io;
use std::rc::Rc;

use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

/// A Wiremock server together with the runtime that owns it.
///
/// Cloning shares both, so the harness can live in an `rstest-bdd` Slot.
#[derive(Clone)]
pub struct MockGitHub {
    runtime: Rc<Runtime>,
    server: Rc<MockServer>,
}

impl MockGitHub {
    /// Starts a fresh server on a new multi-threaded runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the Tokio runtime cannot be created.
    pub fn start() -> io::Result<Self> {
        let runtime = Runtime::new()?;
        let server = runtime.block_on(MockServer::start());
        Ok(Self {
            runtime: Rc::new(runtime),
            server: Rc::new(server),
        })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Base URL, usable as a REST API base.
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.block_on(mock.mount(&self.server));
    }

    /// Counts received requests to `path` whose body contains `needle`.
    pub fn requests_containing(&self, path: &str, needle: &str) -> usize {
        self.block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|request| {
                request.url.path() == path
                    && String::from_utf8_lossy(&request.body).contains(needle)
            })
            .count()
    }
}
