use std::time::Duration;

pub const TOKEN_PATH: &str = "/auth/v1/token";
pub const USER_PROFILE_PATH: &str = "/api/v1/users/me";
pub const TICKERS_PATH: &str = "/api/v1/markets/tickers";
pub const TICKER_PATH: &str = "/api/v1/markets/ticker";

/// Market segment, session and currency appended to a cedear code on the single-ticker path.
pub const CEDEAR_SUFFIX: &str = "0003-C-CT-ARS";
/// Settlement segment used to filter the tickers search.
pub const SETTLEMENT_SEGMENT: &str = "C";

pub const ACCOUNT_ID_HEADER: &str = "X-Account-Id";
pub const USER_AGENT: &str = concat!("autoshort/", env!("CARGO_PKG_VERSION"));

/// Sessions older (or younger, on a skewed clock) than this are ignored.
pub const SESSION_TTL: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(30);
