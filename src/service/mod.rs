mod access_log;
mod client_ip;
mod echo;

pub use access_log::AccessLog;
pub use access_log::AccessLogLayer;
pub use client_ip::ClientIp;
pub use client_ip::ClientIpLayer;
pub use client_ip::ClientIpService;
pub use echo::EchoService;
