//! Prelude
pub use embedded_hal::prelude::*;

pub use crate::delay::DelayExt as _lpc17xx_hal_delay_DelayExt;
pub use crate::gpio::GpioExt as _lpc17xx_hal_gpio_GpioExt;
pub use crate::time::U32Ext as _lpc17xx_hal_time_U32Ext;
