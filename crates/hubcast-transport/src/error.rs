/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The client's protocol handshake was malformed or asked for a
    /// protocol the server doesn't speak.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// A broadcast reached some connections but not all of them.
    #[error("delivery failed for {failed} of {total} connections")]
    Delivery {
        /// Connections that could not be written to.
        failed: usize,
        /// Connections the broadcast was attempted on.
        total: usize,
    },
}
