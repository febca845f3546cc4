pub mod adc;
pub mod analog_comparator;
pub mod fxos8700;
pub mod nonvolatile_storage;
pub mod radio;
pub mod rf233;
pub mod udp_6lowpan;
pub mod usb;

pub use self::adc::AdcComponent;
pub use self::analog_comparator::AcComponent;
pub use self::fxos8700::NineDofComponent;
pub use self::nonvolatile_storage::NonvolatileStorageComponent;
pub use self::radio::RadioComponent;
pub use self::rf233::RF233Component;
pub use self::udp_6lowpan::UDPComponent;
pub use self::usb::UsbComponent;
