//! Single-shot MQTT session: connect, run one continuation, flush, disconnect.
//!
//! The broker's CONNACK is the only asynchronous event the application cares
//! about. `OneShotSession::run` turns it into a blocking wait-for-one-event:
//!
//! ```text
//! poll ──(CONNACK / refusal)──> on_connect(outcome) -> messages
//!                                     │
//!                      enqueue messages + DISCONNECT
//!                                     │
//!                 poll until DISCONNECT is written (bounded)
//!                                     │
//!                                  teardown
//! ```
//!
//! There is no reconnection and no retry. A refused connection is reported in
//! the `ConnectOutcome`, the continuation still runs, and nothing is flushed.

use std::time::Duration;

use rumqttc::{
    AsyncClient, ClientError, ConnectReturnCode, ConnectionError, Event, EventLoop, Outgoing,
    Packet,
};
use tracing::{debug, trace, warn};

use super::{
    client::ClientBuilder, config::Config, error::TransferError, message::OutgoingMessage,
};

/// How the broker answered our CONNECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub code: ConnectReturnCode,
    pub session_present: bool,
}

impl ConnectOutcome {
    pub fn is_accepted(&self) -> bool {
        self.code == ConnectReturnCode::Success
    }

    /// Numeric MQTT 3.1.1 CONNACK return code.
    pub fn return_code(&self) -> u8 {
        connack_return_code(self.code)
    }

    pub fn describe(&self) -> &'static str {
        interpret_connack(self.code)
    }
}

/// Summary of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub outcome: ConnectOutcome,
    /// Messages produced by the continuation.
    pub requested: usize,
    /// Messages written to the socket before DISCONNECT.
    pub sent: usize,
}

/// Maps a CONNACK return code to its wire value.
pub fn connack_return_code(code: ConnectReturnCode) -> u8 {
    match code {
        ConnectReturnCode::Success => 0,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

/// Human-readable description of a CONNACK return code.
pub fn interpret_connack(code: ConnectReturnCode) -> &'static str {
    match code {
        ConnectReturnCode::Success => "Connection accepted",
        ConnectReturnCode::RefusedProtocolVersion => "Unacceptable protocol version",
        ConnectReturnCode::BadClientId => "Client identifier rejected",
        ConnectReturnCode::ServiceUnavailable => "Server unavailable",
        ConnectReturnCode::BadUserNamePassword => "Bad username or password",
        ConnectReturnCode::NotAuthorized => "Not authorized",
    }
}

/// Result of driving the event loop by one event.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Published,
    Disconnected,
}

/// One connect-publish-disconnect cycle against a broker.
pub struct OneShotSession {
    client: AsyncClient,
    event_loop: EventLoop,
    connection_timeout: Duration,
    flush_timeout: Duration,
}

impl OneShotSession {
    /// Validates `config` and prepares a client. No network traffic happens
    /// until `run` is awaited.
    pub fn new(config: &Config) -> Result<Self, TransferError> {
        let (client, event_loop) = ClientBuilder::from_config(config)?.build()?;
        Ok(Self {
            client,
            event_loop,
            connection_timeout: config.connection_timeout(),
            flush_timeout: config.flush_timeout(),
        })
    }

    /// Connects, hands the outcome to `on_connect` exactly once, publishes
    /// whatever it returns, then disconnects.
    ///
    /// # Errors
    ///
    /// Network failures other than a refused CONNACK, and timeouts, are
    /// returned as `TransferError`.
    pub async fn run<F>(mut self, on_connect: F) -> Result<SessionReport, TransferError>
    where
        F: FnOnce(&ConnectOutcome) -> Vec<OutgoingMessage>,
    {
        let outcome = self.await_connack().await?;
        let messages = on_connect(&outcome);

        let mut report = SessionReport {
            outcome,
            requested: messages.len(),
            sent: 0,
        };

        if !outcome.is_accepted() {
            warn!(
                "Broker refused the connection ({}), {} message(s) not sent",
                outcome.describe(),
                messages.len()
            );
            return Ok(report);
        }

        let flush_timeout = self.flush_timeout;
        tokio::time::timeout(flush_timeout, self.flush(&messages, &mut report))
            .await
            .map_err(|_| TransferError::Timeout {
                stage: "flush",
                elapsed: flush_timeout,
            })??;

        debug!(
            "Session closed: {}/{} message(s) written",
            report.sent, report.requested
        );
        Ok(report)
    }

    /// Drives the event loop until the broker answers CONNECT.
    async fn await_connack(&mut self) -> Result<ConnectOutcome, TransferError> {
        let connection_timeout = self.connection_timeout;
        let wait = async {
            loop {
                match self.event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        return Ok(ConnectOutcome {
                            code: ack.code,
                            session_present: ack.session_present,
                        });
                    }
                    Ok(event) => trace!("Event before CONNACK: {:?}", event),
                    Err(ConnectionError::ConnectionRefused(code)) => {
                        return Ok(ConnectOutcome {
                            code,
                            session_present: false,
                        });
                    }
                    Err(e) => return Err(TransferError::from(e)),
                }
            }
        };

        tokio::time::timeout(connection_timeout, wait)
            .await
            .map_err(|_| TransferError::Timeout {
                stage: "CONNACK",
                elapsed: connection_timeout,
            })?
    }

    /// Queues every message and a DISCONNECT, then polls until the
    /// DISCONNECT has been written.
    async fn flush(
        &mut self,
        messages: &[OutgoingMessage],
        report: &mut SessionReport,
    ) -> Result<(), TransferError> {
        for message in messages {
            loop {
                match self.client.try_publish(
                    message.topic.clone(),
                    message.qos,
                    message.retain,
                    message.payload.clone(),
                ) {
                    Ok(()) => break,
                    // Request queue full: let the event loop drain one request.
                    Err(ClientError::TryRequest(_)) => {
                        if self.step(report).await? == Step::Disconnected {
                            return Ok(());
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        loop {
            match self.client.try_disconnect() {
                Ok(()) => break,
                Err(ClientError::TryRequest(_)) => {
                    if self.step(report).await? == Step::Disconnected {
                        return Ok(());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        while self.step(report).await? != Step::Disconnected {}
        Ok(())
    }

    async fn step(&mut self, report: &mut SessionReport) -> Result<Step, TransferError> {
        let step = match self.event_loop.poll().await? {
            Event::Outgoing(Outgoing::Publish(_)) => {
                report.sent += 1;
                Step::Published
            }
            Event::Outgoing(Outgoing::Disconnect) => Step::Disconnected,
            event => {
                trace!("Session event: {:?}", event);
                Step::Continue
            }
        };
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    /// Reads one MQTT control packet: (first header byte, body).
    async fn read_packet(socket: &mut TcpStream) -> (u8, Vec<u8>) {
        let header = socket.read_u8().await.unwrap();
        let mut remaining = 0usize;
        let mut shift = 0;
        loop {
            let byte = socket.read_u8().await.unwrap();
            remaining |= ((byte & 0x7F) as usize) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        let mut body = vec![0u8; remaining];
        socket.read_exact(&mut body).await.unwrap();
        (header, body)
    }

    /// Splits a QoS 0 PUBLISH body into (topic, payload).
    fn decode_publish(body: &[u8]) -> (String, String) {
        let len = u16::from_be_bytes([body[0], body[1]]) as usize;
        let topic = String::from_utf8(body[2..2 + len].to_vec()).unwrap();
        let payload = String::from_utf8(body[2 + len..].to_vec()).unwrap();
        (topic, payload)
    }

    /// Accepts one client, answers CONNECT with `return_code` and records
    /// every packet until DISCONNECT or EOF.
    async fn fake_broker(return_code: u8) -> (u16, tokio::task::JoinHandle<Vec<(u8, Vec<u8>)>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let (connect, _) = read_packet(&mut socket).await;
            assert_eq!(connect >> 4, 1, "first packet must be CONNECT");
            socket
                .write_all(&[0x20, 0x02, 0x00, return_code])
                .await
                .unwrap();

            let mut packets = Vec::new();
            if return_code != 0 {
                return packets;
            }
            loop {
                let packet = read_packet(&mut socket).await;
                let done = packet.0 == 0xE0;
                packets.push(packet);
                if done {
                    break;
                }
            }
            packets
        });
        (port, handle)
    }

    fn test_config(port: u16) -> Config {
        Config {
            connection_timeout: 5,
            flush_timeout: 5,
            ..Config::new("127.0.0.1", port, "hass", "secret")
        }
    }

    #[test]
    fn test_connack_codes() {
        assert_eq!(connack_return_code(ConnectReturnCode::Success), 0);
        assert_eq!(connack_return_code(ConnectReturnCode::BadUserNamePassword), 4);
        assert_eq!(connack_return_code(ConnectReturnCode::NotAuthorized), 5);
        assert_eq!(
            interpret_connack(ConnectReturnCode::BadUserNamePassword),
            "Bad username or password"
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = ConnectOutcome {
            code: ConnectReturnCode::NotAuthorized,
            session_present: false,
        };
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.return_code(), 5);
        assert_eq!(outcome.describe(), "Not authorized");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config::new("", 1883, "hass", "secret");
        assert!(matches!(
            OneShotSession::new(&config),
            Err(TransferError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_run_publishes_then_disconnects() {
        let (port, broker) = fake_broker(0).await;
        let session = OneShotSession::new(&test_config(port)).unwrap();

        let mut calls = 0;
        let report = session
            .run(|outcome| {
                calls += 1;
                assert!(outcome.is_accepted());
                vec![
                    OutgoingMessage::at_most_once("home/eh203/ulkolampotila/value", "23"),
                    OutgoingMessage::at_most_once("home/eh203/l1_menovesi/value", "45.2"),
                ]
            })
            .await
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(report.requested, 2);
        assert_eq!(report.sent, 2);

        let packets = broker.await.unwrap();
        let publishes: Vec<_> = packets
            .iter()
            .filter(|(header, _)| header >> 4 == 3)
            .map(|(header, body)| {
                assert_eq!(header & 0x0F, 0, "QoS 0, not retained");
                decode_publish(body)
            })
            .collect();
        assert_eq!(
            publishes,
            vec![
                ("home/eh203/ulkolampotila/value".to_string(), "23".to_string()),
                ("home/eh203/l1_menovesi/value".to_string(), "45.2".to_string()),
            ]
        );
        assert_eq!(packets.last().map(|(h, _)| *h), Some(0xE0));
    }

    #[tokio::test]
    async fn test_run_with_more_messages_than_queue_capacity() {
        let (port, broker) = fake_broker(0).await;
        let session = OneShotSession::new(&test_config(port)).unwrap();

        let messages: Vec<_> = (0..40)
            .map(|i| OutgoingMessage::at_most_once(format!("t/{i}/value"), i.to_string()))
            .collect();
        let report = session.run(move |_| messages).await.unwrap();

        assert_eq!(report.sent, 40);
        let packets = broker.await.unwrap();
        assert_eq!(packets.iter().filter(|(h, _)| h >> 4 == 3).count(), 40);
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported_not_raised() {
        let (port, broker) = fake_broker(4).await;
        let session = OneShotSession::new(&test_config(port)).unwrap();

        let report = session
            .run(|outcome| {
                assert_eq!(outcome.return_code(), 4);
                vec![OutgoingMessage::at_most_once("t/value", "1")]
            })
            .await
            .unwrap();

        assert!(!report.outcome.is_accepted());
        assert_eq!(report.requested, 1);
        assert_eq!(report.sent, 0);
        assert!(broker.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let session = OneShotSession::new(&test_config(port)).unwrap();

        let result = session.run(|_| Vec::new()).await;
        assert!(matches!(result, Err(TransferError::ClientConnection(_))));
    }
}
