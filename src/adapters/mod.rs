pub mod converter;
pub mod health_handler;
pub mod http_dispatcher;
pub mod metrics_handler;
pub mod receiver_handler;
pub mod sender_handler;
pub mod translator;

#[cfg(test)]
mod receiver_handler_test;
