use anyhow::{Context as _, Result, anyhow, bail};
use embedded_hal::i2c::I2c;
use tracing::warn;

use crate::tsl2561::{Gain, IntegrationTime, Luminosity, compute_lux};

// Ref: TSL2560/TSL2561 datasheet, "Register Set" and "Command Register"
pub const DEFAULT_ADDRESS: u8 = 0x39;

const COMMAND_BIT: u8 = 0x80;
const WORD_BIT: u8 = 0x20;

const CONTROL_POWER_ON: u8 = 0x03;
const CONTROL_POWER_OFF: u8 = 0x00;

const REGISTER_CONTROL: u8 = 0x00;
const REGISTER_TIMING: u8 = 0x01;
const REGISTER_ID: u8 = 0x0a;
const REGISTER_CHAN0_LOW: u8 = 0x0c;
const REGISTER_CHAN1_LOW: u8 = 0x0e;

const TIMING_GAIN_MASK: u8 = 0x10;
const TIMING_INTEG_MASK: u8 = 0x03;

// The datasheet lists 0b0001 for the TSL2561, parts in the field report 0b0101.
const PART_NUMBER: u8 = 0x05;

#[derive(Debug)]
pub struct Tsl2561<I> {
    i2c: I,
    address: u8,
    gain: Gain,
    integration_time: IntegrationTime,
}

impl<I: I2c> Tsl2561<I> {
    /// Powers the device on and checks that it identifies as a TSL2561.
    pub fn new(i2c: I, address: u8) -> Result<Self> {
        let mut sensor = Self {
            i2c,
            address,
            gain: Gain::default(),
            integration_time: IntegrationTime::default(),
        };

        sensor.enable().context("failed to power on TSL2561")?;

        let (part_number, revision) = sensor.chip_id().context("failed to read TSL2561 chip id")?;
        if part_number != PART_NUMBER {
            bail!(
                "no TSL2561 found at 0x{address:02x}: part 0x{part_number:x} rev 0x{revision:x}"
            );
        }

        let timing = sensor
            .read_register(REGISTER_TIMING)
            .context("failed to read TSL2561 timing")?;
        sensor.gain = Gain::from_raw(timing >> 4);
        sensor.integration_time = IntegrationTime::from_raw(timing).unwrap_or_default();

        Ok(sensor)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn integration_time(&self) -> IntegrationTime {
        self.integration_time
    }

    pub fn enable(&mut self) -> Result<()> {
        self.write_register(REGISTER_CONTROL, CONTROL_POWER_ON)
    }

    pub fn disable(&mut self) -> Result<()> {
        self.write_register(REGISTER_CONTROL, CONTROL_POWER_OFF)
    }

    /// Returns `(part_number, revision)`.
    pub fn chip_id(&mut self) -> Result<(u8, u8)> {
        let id = self.read_register(REGISTER_ID)?;
        Ok((id >> 4, id & 0x0f))
    }

    pub fn set_gain(&mut self, gain: Gain) -> Result<()> {
        let timing = self.read_register(REGISTER_TIMING)?;
        self.write_register(
            REGISTER_TIMING,
            (timing & !TIMING_GAIN_MASK) | (gain.raw() << 4),
        )?;
        self.gain = gain;

        Ok(())
    }

    pub fn set_integration_time(&mut self, integration_time: IntegrationTime) -> Result<()> {
        let timing = self.read_register(REGISTER_TIMING)?;
        self.write_register(
            REGISTER_TIMING,
            (timing & !TIMING_INTEG_MASK) | integration_time.raw(),
        )?;
        self.integration_time = integration_time;

        Ok(())
    }

    /// Applies both timing settings. The device is powered off if either fails.
    pub fn configure(&mut self, gain: Gain, integration_time: IntegrationTime) -> Result<()> {
        let result = self
            .set_gain(gain)
            .context("failed to set TSL2561 gain")
            .and_then(|()| {
                self.set_integration_time(integration_time)
                    .context("failed to set TSL2561 integration time")
            });

        if result.is_err()
            && let Err(e) = self.disable()
        {
            warn!("failed to power off TSL2561: {e:#}");
        }

        result
    }

    pub fn broadband(&mut self) -> Result<u16> {
        self.read_word(REGISTER_CHAN0_LOW)
    }

    pub fn infrared(&mut self) -> Result<u16> {
        self.read_word(REGISTER_CHAN1_LOW)
    }

    /// Reads both channels of the last completed conversion.
    pub fn luminosity(&mut self) -> Result<Luminosity> {
        let broadband = self.broadband().context("failed to read broadband channel")?;
        let infrared = self.infrared().context("failed to read infrared channel")?;
        let lux = compute_lux(broadband, infrared, self.gain, self.integration_time)?;

        Ok(Luminosity {
            lux,
            broadband,
            infrared,
        })
    }

    pub fn release(self) -> I {
        self.i2c
    }

    fn read_register(&mut self, register: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[COMMAND_BIT | register], &mut buf)
            .map_err(|e| anyhow!("I2C read of register 0x{register:02x} failed: {e:?}"))?;

        Ok(buf[0])
    }

    fn read_word(&mut self, register: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[COMMAND_BIT | WORD_BIT | register], &mut buf)
            .map_err(|e| anyhow!("I2C word read of register 0x{register:02x} failed: {e:?}"))?;

        Ok(u16::from_le_bytes(buf))
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[COMMAND_BIT | register, value])
            .map_err(|e| anyhow!("I2C write of register 0x{register:02x} failed: {e:?}"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use embedded_hal::i2c::{ErrorKind, ErrorType, Operation};

    use super::*;

    /// In-memory register file answering the TSL2561 command protocol.
    #[derive(Debug)]
    pub(crate) struct FakeBus {
        pub registers: [u8; 16],
        pub writes: Vec<(u8, Vec<u8>)>,
        pub fail: bool,
        pub fail_register: Option<u8>,
        pointer: u8,
    }

    impl FakeBus {
        pub(crate) fn tsl2561() -> Self {
            let mut registers = [0u8; 16];
            registers[REGISTER_ID as usize] = 0x50;
            registers[REGISTER_TIMING as usize] = 0x02;
            Self {
                registers,
                writes: Vec::new(),
                fail: false,
                fail_register: None,
                pointer: 0,
            }
        }

        pub(crate) fn with_channels(mut self, ch0: u16, ch1: u16) -> Self {
            let [c0l, c0h] = ch0.to_le_bytes();
            let [c1l, c1h] = ch1.to_le_bytes();
            self.registers[0x0c] = c0l;
            self.registers[0x0d] = c0h;
            self.registers[0x0e] = c1l;
            self.registers[0x0f] = c1h;
            self
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail || address != DEFAULT_ADDRESS {
                return Err(ErrorKind::Other);
            }

            for operation in operations {
                match operation {
                    Operation::Write(bytes) => {
                        let Some((&command, data)) = bytes.split_first() else {
                            continue;
                        };
                        assert_ne!(command & COMMAND_BIT, 0, "command bit must be set");
                        if self.fail_register == Some(command & 0x0f) {
                            return Err(ErrorKind::Other);
                        }
                        self.pointer = command & 0x0f;
                        if let Some(&value) = data.first() {
                            self.registers[self.pointer as usize] = value;
                        }
                        self.writes.push((address, bytes.to_vec()));
                    }
                    Operation::Read(buf) => {
                        for (i, b) in buf.iter_mut().enumerate() {
                            *b = self.registers[(self.pointer as usize + i) & 0x0f];
                        }
                    }
                }
            }

            Ok(())
        }
    }

    #[test]
    fn new_powers_on_and_reads_current_timing() {
        let mut bus = FakeBus::tsl2561();
        bus.registers[REGISTER_TIMING as usize] = 0x11;

        let sensor = Tsl2561::new(bus, DEFAULT_ADDRESS).unwrap();
        assert_eq!(sensor.gain(), Gain::High);
        assert_eq!(sensor.integration_time(), IntegrationTime::Ms101);

        let bus = sensor.release();
        assert_eq!(bus.registers[REGISTER_CONTROL as usize], CONTROL_POWER_ON);
        assert_eq!(bus.writes[0], (DEFAULT_ADDRESS, vec![0x80, 0x03]));
    }

    #[test]
    fn new_rejects_other_parts() {
        let mut bus = FakeBus::tsl2561();
        bus.registers[REGISTER_ID as usize] = 0x11;

        let err = Tsl2561::new(bus, DEFAULT_ADDRESS).unwrap_err();
        assert!(err.to_string().contains("part 0x1 rev 0x1"), "{err:#}");
    }

    #[test]
    fn bus_failure_names_the_step() {
        let mut bus = FakeBus::tsl2561();
        bus.fail = true;

        let err = Tsl2561::new(bus, DEFAULT_ADDRESS).unwrap_err();
        assert!(format!("{err:#}").contains("failed to power on TSL2561"));
    }

    #[test]
    fn timing_fields_are_updated_independently() {
        let mut sensor = Tsl2561::new(FakeBus::tsl2561(), DEFAULT_ADDRESS).unwrap();

        sensor.set_gain(Gain::High).unwrap();
        sensor.set_integration_time(IntegrationTime::Ms13).unwrap();
        assert_eq!(sensor.gain(), Gain::High);
        assert_eq!(sensor.integration_time(), IntegrationTime::Ms13);

        sensor.set_gain(Gain::Low).unwrap();
        let bus = sensor.release();
        assert_eq!(bus.registers[REGISTER_TIMING as usize], 0x00);
    }

    #[test]
    fn configure_applies_both_settings() {
        let mut sensor = Tsl2561::new(FakeBus::tsl2561(), DEFAULT_ADDRESS).unwrap();
        sensor.configure(Gain::High, IntegrationTime::Ms101).unwrap();

        let bus = sensor.release();
        assert_eq!(bus.registers[REGISTER_TIMING as usize], 0x11);
        assert_eq!(bus.registers[REGISTER_CONTROL as usize], CONTROL_POWER_ON);
    }

    #[test]
    fn failed_configure_powers_off() {
        let mut sensor = Tsl2561::new(FakeBus::tsl2561(), DEFAULT_ADDRESS).unwrap();
        sensor.i2c.fail_register = Some(REGISTER_TIMING);

        let err = sensor
            .configure(Gain::High, IntegrationTime::Ms13)
            .unwrap_err();
        assert!(format!("{err:#}").starts_with("failed to set TSL2561 gain"));

        let bus = sensor.release();
        assert_eq!(bus.registers[REGISTER_CONTROL as usize], CONTROL_POWER_OFF);
    }

    #[test]
    fn luminosity_reads_little_endian_words() {
        let bus = FakeBus::tsl2561().with_channels(0x1234, 0x0456);
        let mut sensor = Tsl2561::new(bus, DEFAULT_ADDRESS).unwrap();
        sensor.set_gain(Gain::High).unwrap();

        let luminosity = sensor.luminosity().unwrap();
        assert_eq!(luminosity.broadband, 0x1234);
        assert_eq!(luminosity.infrared, 0x0456);
        assert_eq!(
            luminosity.lux,
            compute_lux(0x1234, 0x0456, Gain::High, IntegrationTime::Ms402).unwrap()
        );
    }

    #[test]
    fn disable_powers_off() {
        let mut sensor = Tsl2561::new(FakeBus::tsl2561(), DEFAULT_ADDRESS).unwrap();
        sensor.disable().unwrap();

        let bus = sensor.release();
        assert_eq!(bus.registers[REGISTER_CONTROL as usize], CONTROL_POWER_OFF);
    }
}
