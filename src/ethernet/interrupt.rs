//! EMAC interrupts and callback dispatch

/// EMAC interrupt events, in dispatch order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    /// Fatal receive overrun
    RxOverrun = 0,
    /// Receive error
    RxError = 1,
    /// All RX descriptors processed
    RxFinished = 2,
    /// A fragment with the interrupt bit set was received
    RxDone = 3,
    /// Fatal transmit underrun
    TxUnderrun = 4,
    /// Transmit error
    TxError = 5,
    /// All TX descriptors processed
    TxFinished = 6,
    /// A fragment with the interrupt bit set was sent
    TxDone = 7,
    /// Software interrupt through `IntSet`
    Soft = 8,
    /// Wake-on-LAN event
    Wakeup = 9,
}

impl Interrupt {
    /// All events, in dispatch order
    pub const ALL: [Interrupt; 10] = [
        Interrupt::RxOverrun,
        Interrupt::RxError,
        Interrupt::RxFinished,
        Interrupt::RxDone,
        Interrupt::TxUnderrun,
        Interrupt::TxError,
        Interrupt::TxFinished,
        Interrupt::TxDone,
        Interrupt::Soft,
        Interrupt::Wakeup,
    ];

    /// Slot in the callback table
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Bit in `IntStatus`, `IntEnable`, `IntClear` and `IntSet`
    pub fn flag(self) -> Interrupts {
        match self {
            Interrupt::RxOverrun => Interrupts::RX_OVERRUN,
            Interrupt::RxError => Interrupts::RX_ERROR,
            Interrupt::RxFinished => Interrupts::RX_FINISHED,
            Interrupt::RxDone => Interrupts::RX_DONE,
            Interrupt::TxUnderrun => Interrupts::TX_UNDERRUN,
            Interrupt::TxError => Interrupts::TX_ERROR,
            Interrupt::TxFinished => Interrupts::TX_FINISHED,
            Interrupt::TxDone => Interrupts::TX_DONE,
            Interrupt::Soft => Interrupts::SOFT,
            Interrupt::Wakeup => Interrupts::WAKEUP,
        }
    }
}

impl From<Interrupt> for Interrupts {
    fn from(i: Interrupt) -> Self {
        i.flag()
    }
}

impl TryFrom<Interrupts> for Interrupt {
    type Error = ();

    /// The single event a mask selects: the lowest MAC event, else the
    /// software interrupt, else wake-up.
    fn try_from(mask: Interrupts) -> Result<Self, ()> {
        Interrupt::ALL
            .iter()
            .copied()
            .find(|i| mask.contains(i.flag()))
            .ok_or(())
    }
}

bitflags::bitflags! {
    /// A set of EMAC interrupts.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct Interrupts: u32 {
        /// Fatal receive overrun
        const RX_OVERRUN = 1 << 0;
        /// Receive error
        const RX_ERROR = 1 << 1;
        /// All RX descriptors processed
        const RX_FINISHED = 1 << 2;
        /// A fragment with the interrupt bit set was received
        const RX_DONE = 1 << 3;
        /// Fatal transmit underrun
        const TX_UNDERRUN = 1 << 4;
        /// Transmit error
        const TX_ERROR = 1 << 5;
        /// All TX descriptors processed
        const TX_FINISHED = 1 << 6;
        /// A fragment with the interrupt bit set was sent
        const TX_DONE = 1 << 7;
        /// Software interrupt
        const SOFT = 1 << 12;
        /// Wake-on-LAN event
        const WAKEUP = 1 << 13;

        /// The eight MAC events
        const MAC_EVENTS = 0xFF;
    }
}

/// Interrupt callback
pub type Callback = fn();

/// One optional callback per [`Interrupt`]
#[derive(Clone, Copy, Default)]
pub struct CallbackTable {
    slots: [Option<Callback>; 10],
}

impl CallbackTable {
    pub const fn new() -> Self {
        CallbackTable { slots: [None; 10] }
    }

    /// Installs `callback` for `interrupt`, replacing any previous one.
    pub fn set(&mut self, interrupt: Interrupt, callback: Option<Callback>) {
        self.slots[interrupt.ordinal()] = callback;
    }

    pub fn get(&self, interrupt: Interrupt) -> Option<Callback> {
        self.slots[interrupt.ordinal()]
    }

    /// Runs the callbacks of every event in `status`, in dispatch order.
    ///
    /// `before_wakeup` runs ahead of a registered wake-up callback.
    pub(crate) fn dispatch<F: FnOnce()>(
        &self,
        status: Interrupts,
        before_wakeup: F,
    ) {
        for interrupt in Interrupt::ALL.iter().take(9) {
            if status.contains(interrupt.flag()) {
                if let Some(callback) = self.get(*interrupt) {
                    callback();
                }
            }
        }

        if status.contains(Interrupts::WAKEUP) {
            if let Some(callback) = self.get(Interrupt::Wakeup) {
                before_wakeup();
                callback();
            }
        }
    }
}
