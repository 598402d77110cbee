//! Outbound provider integrations and their status vocabularies.

mod provider;
mod response;
mod ses_provider;
mod sinch_provider;

#[cfg(test)]
pub use provider::MockProviderClient;
pub use provider::{
    OutboundEmail, OutboundMessage, OutboundSms, ProviderClient, ProviderError, ProviderReference,
};
pub use response::{Classification, ProviderResponse, SesEventType, SinchStatus};
pub use ses_provider::{SES, SesClient, punycode_encode_email};
pub use sinch_provider::{SINCH, SinchClient};
