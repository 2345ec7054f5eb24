//! In-memory VL53L1X register file for driving the driver without hardware.

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use vl53l1x_reader::i2c::Bus;

pub const DISTANCE_MM: u16 = 500;
pub const OSC_CALIBRATE: u16 = 0x02bc;

#[derive(Debug, thiserror::Error)]
#[error("bus fault")]
pub struct BusFault;

#[derive(Debug)]
struct State {
    regs: Vec<u8>,
    ranging: bool,
    ready: bool,
    stalled: bool,
    fail_reads: bool,
    writes: Vec<(u16, Vec<u8>)>,
}

/// Cloning shares the register file, so a test can keep a handle after
/// giving the bus to the driver.
#[derive(Debug, Clone)]
pub struct FakeSensor(Rc<RefCell<State>>);

impl FakeSensor {
    pub fn new() -> Self {
        let fake = Self(Rc::new(RefCell::new(State {
            regs: vec![0; 0x200],
            ranging: false,
            ready: false,
            stalled: false,
            fail_reads: false,
            writes: Vec::new(),
        })));

        fake.set_word(0x010f, 0xeacc); // model id
        fake.set_byte(0x00e5, 0x01); // booted
        fake.set_word(0x00de, OSC_CALIBRATE);
        fake.set_byte(0x0030, 0x01); // active high

        // result block
        fake.set_byte(0x0089, 0x09); // valid
        fake.set_byte(0x008c, 0x20);
        fake.set_word(0x0090, 0x0010);
        fake.set_word(0x0096, DISTANCE_MM);
        fake.set_word(0x0098, 0x0040);

        fake
    }

    pub fn byte(&self, reg: u16) -> u8 {
        self.0.borrow().regs[usize::from(reg)]
    }

    pub fn word(&self, reg: u16) -> u16 {
        u16::from_be_bytes([self.byte(reg), self.byte(reg + 1)])
    }

    pub fn dword(&self, reg: u16) -> u32 {
        u32::from_be_bytes([
            self.byte(reg),
            self.byte(reg + 1),
            self.byte(reg + 2),
            self.byte(reg + 3),
        ])
    }

    pub fn set_byte(&self, reg: u16, value: u8) {
        self.0.borrow_mut().regs[usize::from(reg)] = value;
    }

    pub fn set_word(&self, reg: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.set_byte(reg, hi);
        self.set_byte(reg + 1, lo);
    }

    /// Never produce a sample.
    pub fn stall(&self) {
        self.0.borrow_mut().stalled = true;
        self.sync_ready();
    }

    pub fn fail_reads(&self, fail: bool) {
        self.0.borrow_mut().fail_reads = fail;
    }

    pub fn ranging(&self) -> bool {
        self.0.borrow().ranging
    }

    /// Payloads written starting at `reg`.
    pub fn writes_to(&self, reg: u16) -> Vec<Vec<u8>> {
        self.0
            .borrow()
            .writes
            .iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, data)| data.clone())
            .collect()
    }

    fn sync_ready(&self) {
        let mut state = self.0.borrow_mut();
        state.ready = state.ranging && !state.stalled;
        let active = u8::from(state.regs[0x30] >> 4 & 1 == 0);
        let level = if state.ready { active } else { active ^ 1 };
        state.regs[0x31] = (state.regs[0x31] & !1) | level;
    }
}

impl Bus for FakeSensor {
    type Error = BusFault;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let reg = u16::from_be_bytes([data[0], data[1]]);
        let payload = &data[2..];
        {
            let mut state = self.0.borrow_mut();
            state.writes.push((reg, payload.to_vec()));
            for (offset, value) in payload.iter().enumerate() {
                let addr = usize::from(reg) + offset;
                state.regs[addr] = *value;
                if addr == 0x87 {
                    state.ranging = *value == 0x40;
                }
            }
        }
        // a cleared interrupt is followed by the next sample right away
        self.sync_ready();
        Ok(())
    }

    fn write_read(&mut self, data: &[u8], buf: &mut [u8]) -> Result<(), Self::Error> {
        let state = self.0.borrow();
        if state.fail_reads {
            return Err(BusFault);
        }
        let reg = usize::from(u16::from_be_bytes([data[0], data[1]]));
        buf.copy_from_slice(&state.regs[reg..reg + buf.len()]);
        Ok(())
    }
}
