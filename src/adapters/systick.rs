//! Cortex-M SysTick adapter.
//!
//! Maps [`TickCounterPort`] onto the SysTick registers and [`CpuPort`]
//! onto the SysTick `TICKINT` bit and `wfi`.  Masking clears `TICKINT`
//! only; PRIMASK is left alone so every other interrupt still ends `wfi`
//! and preempts the controller.

use cortex_m::asm;
use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;

use crate::app::ports::{CpuPort, TickCounterPort};

/// SysTick clocked from the core clock.
pub struct SysTickCounter {
    syst: SYST,
}

impl SysTickCounter {
    /// Take ownership of SysTick and clock it from the core clock.  The
    /// tickless controller programs the reload at init.
    pub fn new(mut syst: SYST) -> Self {
        syst.disable_counter();
        syst.set_clock_source(SystClkSource::Core);
        syst.enable_interrupt();
        Self { syst }
    }
}

impl TickCounterPort for SysTickCounter {
    fn disable_counter(&mut self) {
        self.syst.disable_counter();
    }

    fn enable_counter(&mut self) {
        self.syst.enable_counter();
    }

    fn current_value(&self) -> u32 {
        SYST::get_current()
    }

    fn clear_current(&mut self) {
        self.syst.clear_current();
    }

    fn set_reload(&mut self, value: u32) {
        self.syst.set_reload(value);
    }

    fn take_count_flag(&mut self) -> bool {
        self.syst.has_wrapped()
    }
}

impl CpuPort for SysTickCounter {
    fn mask_tick_interrupt(&mut self) {
        self.syst.disable_interrupt();
    }

    fn unmask_tick_interrupt(&mut self) {
        self.syst.enable_interrupt();
    }

    fn wait_for_interrupt(&mut self) {
        asm::dsb();
        asm::wfi();
        asm::isb();
    }
}
