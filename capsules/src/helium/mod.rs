pub mod device;
pub mod driver;
// pub mod mac;
pub mod framer;
pub mod virtual_rfcore;

pub use self::driver::Helium;
pub use self::driver::DRIVER_NUM;
