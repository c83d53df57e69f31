use tracing_subscriber::EnvFilter;

/// Initialize structured logging for a host binary or example.
///
/// Library code never calls this; the embedding application opts in.
pub fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("creatorscope=info".parse().expect("static directive"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
