/// Number of `make` jobs to run: leave a few cores free, never below 4.
pub fn get_parallel_jobs() -> usize {
    let num_jobs = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let jobs = std::cmp::max(4, num_jobs.saturating_sub(4));

    log::debug!(
        "Using {} parallel jobs for build (available cores: {})",
        jobs,
        num_jobs
    );
    jobs
}
