mod config;
mod dispatch;
mod lifecycle;
mod session;
mod support;
mod tls;
