pub mod description;
pub mod gena;
pub mod soap;
pub mod ssdp;
pub mod subscription;

pub use description::{DescriptionError, DeviceDescription, ServiceDescription, fetch_description};
pub use gena::{GenaError, parse_gena_property_set};
pub use soap::{SoapCallResult, SoapError, invoke_action, invoke_action_expecting};
pub use ssdp::{SsdpClient, SsdpEvent};
pub use subscription::{EventCallback, SubscriptionHandle, SubscriptionLoop};
