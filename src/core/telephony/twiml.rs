//! Call-control document returned to the telephony provider's webhook.
//!
//! The document greets the caller, pauses briefly, then connects the call's
//! media to this server's `/media-stream` WebSocket.

/// Path of the media-stream WebSocket endpoint.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

pub const DEFAULT_GREETING: &str = "Please wait while we connect your call to the A. I. voice assistant, powered by Twilio and the Open-A.I. Realtime API";
pub const DEFAULT_READY_MESSAGE: &str = "O.K. you can start talking!";

/// Builder for the connect-to-stream TwiML response.
#[derive(Debug, Clone)]
pub struct ConnectStreamTwiml<'a> {
    pub host: &'a str,
    pub greeting: &'a str,
    pub ready_message: &'a str,
    pub pause_seconds: u32,
}

impl<'a> ConnectStreamTwiml<'a> {
    pub fn new(host: &'a str) -> Self {
        Self {
            host,
            greeting: DEFAULT_GREETING,
            ready_message: DEFAULT_READY_MESSAGE,
            pause_seconds: 1,
        }
    }

    pub fn greeting(mut self, greeting: &'a str) -> Self {
        self.greeting = greeting;
        self
    }

    pub fn ready_message(mut self, ready_message: &'a str) -> Self {
        self.ready_message = ready_message;
        self
    }

    /// WebSocket URL the provider should stream media to.
    pub fn stream_url(&self) -> String {
        format!("wss://{}{}", self.host, MEDIA_STREAM_PATH)
    }

    pub fn render(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <Response>\
             <Say>{}</Say>\
             <Pause length=\"{}\"/>\
             <Say>{}</Say>\
             <Connect><Stream url=\"{}\" /></Connect>\
             </Response>",
            escape_xml(self.greeting),
            self.pause_seconds,
            escape_xml(self.ready_message),
            escape_xml(&self.stream_url()),
        )
    }
}

/// Escape XML special characters in text and attribute values.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
