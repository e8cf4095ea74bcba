//! Exit code logic for the mirror process.
//!
//! Single responsibility: map a crawl report to the process exit outcome.

use mirror_core::crawl::CrawlReport;

use crate::ProcessExit;

/// Determines the process exit outcome from succeeded and failed counts.
pub(crate) fn determine_exit_outcome(succeeded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Interrupted runs always fail; otherwise any successful listing or
/// download makes a run with failures partial.
pub(crate) fn crawl_exit_outcome(report: &CrawlReport) -> ProcessExit {
    if report.interrupted {
        return ProcessExit::Failure;
    }
    determine_exit_outcome(report.listed + report.downloaded, report.failed())
}
