//! Run configuration, filled in from the command surface.

use fhirgraph_client::FetchOptions;

/// Everything the orchestrator needs to know about one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Resource types to transform, in the order given by the caller. The
    /// order only affects how many logical references resolve on the first
    /// pass; correctness comes from the resolve pass.
    pub resource_types: Vec<String>,
    /// Wipe the database before transforming. Destructive; confirming
    /// intent is the caller's job.
    pub delete_first: bool,
    /// Run the placeholder resolve pass after the transforms.
    pub resolve: bool,
    /// Resources requested per server page (`_count`).
    pub page_size: u32,
    /// Per-type cap on fetched resources.
    pub limit: Option<u64>,
    /// Structural validation of fetched bundle entries.
    pub validate: bool,
    /// Strict mode aborts a type's transform on the first validation or
    /// mapping failure; tolerant mode collects and continues.
    pub strict: bool,
    /// Run per-type transform units concurrently and fan out writes.
    pub parallel: bool,
    /// Concurrent per-resource writes within a page when parallel.
    pub write_concurrency: usize,
    /// Base URL the server advertises for itself (from the capability
    /// statement); used to relativize paging links.
    pub server_base: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            resource_types: Vec::new(),
            delete_first: false,
            resolve: false,
            page_size: 250,
            limit: None,
            validate: true,
            strict: false,
            parallel: false,
            write_concurrency: 8,
            server_base: None,
        }
    }
}

impl RunConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            page_size: self.page_size,
            limit: self.limit,
            validate: self.validate,
        }
    }
}
