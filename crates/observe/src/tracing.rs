use {
    crate::{Config, panic_hook},
    std::{io::IsTerminal, sync::Once},
    time::macros::format_description,
    tracing_subscriber::{EnvFilter, fmt::time::UtcTime, prelude::*, util::SubscriberInitExt},
};

/// Initializes the tracing setup of the binary.
/// `env_filter` has similar syntax to env_logger. It is documented at
/// https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html
///
/// All events are written to stderr. Stdout is reserved for the output the
/// binary reports to its caller.
pub fn initialize(config: &Config) {
    set_tracing_subscriber(config);
    panic_hook::install();
}

/// Like [`initialize`], but can be called multiple times in a row. Later calls
/// are ignored.
///
/// Useful for tests.
pub fn initialize_reentrant(env_filter: &str) {
    // The tracing subscriber below is global object so initializing it again in the
    // same process by a different thread would fail.
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        set_tracing_subscriber(&Config::default().with_env_filter(env_filter));
        panic_hook::install();
    });
}

fn set_tracing_subscriber(config: &Config) {
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));

    // Both layers are optional so the registry has the same type regardless of
    // the selected format.
    let (plain, json) = if config.use_json_format {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(timer);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .with_ansi(std::io::stderr().is_terminal());
        (Some(layer), None)
    };

    let result = tracing_subscriber::registry()
        .with(EnvFilter::new(&config.env_filter))
        .with(plain)
        .with(json)
        .try_init();
    if let Err(err) = result {
        eprintln!("tracing subscriber was already initialized: {err}");
    }
}
