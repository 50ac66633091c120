//! `log` backend writing to ITM stimulus port 0
use panic_halt as _;

use cortex_m::iprintln;
use cortex_m::peripheral::{itm, ITM};
use log::{Level, LevelFilter, Metadata, Record};

pub struct Logger {
    level: Level,
}

static LOGGER: Logger = Logger { level: Level::Info };

pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Info))
        .ok();
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        cortex_m::interrupt::free(|_| {
            // NOTE(unsafe) the stimulus port is only written with interrupts
            // disabled
            let itm = unsafe { &mut *(ITM::PTR as *mut itm::RegisterBlock) };
            iprintln!(
                &mut itm.stim[0],
                "{} - {}",
                record.level(),
                record.args()
            );
        });
    }

    fn flush(&self) {}
}
