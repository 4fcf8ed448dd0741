mod delegation;
mod handshake;
mod helpers;
mod shutdown;
