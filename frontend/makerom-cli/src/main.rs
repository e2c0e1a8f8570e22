//! Builds the EPROM image for the 68008 monitor kit from the linker's HEX
//! output.
//!
//! The monitor is linked with its code in the kit's ROM window at 0x40000 and
//! its reset vector (initial SSP + initial PC) at address 0. The EPROM is
//! burned as a flat image starting at address 0, so everything below the ROM
//! window is dropped and the reset vector is copied over the first 8 bytes of
//! the relocated image.

use anyhow::{Context, bail};
use env_logger::Env;
use hexfile::image::MemoryImage;
use std::fs;

const HEX_PATH: &str = "monitor.hex";
const BIN_PATH: &str = "../roms/monitor.bin";

/// Base of the kit's ROM window (0x40000-0x5FFFF)
const ROM_BASE: u32 = 0x40000;

/// Initial supervisor stack pointer + initial program counter
const BOOT_VECTOR_LEN: usize = 8;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let image = MemoryImage::load(HEX_PATH)
        .with_context(|| format!("Error loading HEX image '{HEX_PATH}'"))?;

    if let Some(start_address) = image.start_address() {
        log::debug!("HEX file reports execution start address {start_address:#07X}");
    }

    let rom = build_rom(image)?;

    fs::write(BIN_PATH, &rom)
        .with_context(|| format!("Error writing ROM image '{BIN_PATH}'"))?;

    log::info!("Wrote {} bytes to {BIN_PATH}", rom.len());

    Ok(())
}

fn build_rom(mut image: MemoryImage) -> anyhow::Result<Vec<u8>> {
    let boot_vector = image.read(0..BOOT_VECTOR_LEN as u32);

    image.fill(hexfile::FILL_BYTE);
    image.exclude(0..ROM_BASE);

    let mut rom = image.to_binary();
    if rom.len() < BOOT_VECTOR_LEN {
        bail!("HEX image contains no code above {ROM_BASE:#07X}");
    }

    // The 68008 fetches the initial SSP and PC from the first 8 bytes of ROM
    rom[..BOOT_VECTOR_LEN].copy_from_slice(&boot_vector);

    Ok(rom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOT_VECTOR: [u8; 8] = [0x00, 0x00, 0x10, 0x00, 0x00, 0x04, 0x00, 0x08];

    fn monitor_image() -> MemoryImage {
        let mut image = MemoryImage::new();
        image.insert(0, &BOOT_VECTOR).unwrap();
        image.insert(ROM_BASE, &[0x41, 0xF9, 0x00, 0x00]).unwrap();
        image.insert(ROM_BASE + 0x10, &[0xAA, 0xBB]).unwrap();
        image
    }

    #[test]
    fn output_length_is_image_length_minus_rom_base() {
        let image = monitor_image();
        let max = image.maximum_address().unwrap();

        let rom = build_rom(image).unwrap();
        assert_eq!(rom.len(), (max - ROM_BASE) as usize);
    }

    #[test]
    fn boot_vector_is_preserved() {
        let rom = build_rom(monitor_image()).unwrap();
        assert_eq!(rom[..BOOT_VECTOR_LEN], BOOT_VECTOR);
    }

    #[test]
    fn payload_is_relocated_to_zero() {
        let image = monitor_image();
        let rom = build_rom(image.clone()).unwrap();

        // Every byte past the boot vector matches the original image at
        // (ROM_BASE + offset), including the 0xFF-filled gap
        let original = image.read(ROM_BASE..image.maximum_address().unwrap());
        assert_eq!(rom[BOOT_VECTOR_LEN..], original[BOOT_VECTOR_LEN..]);
        assert_eq!(rom[0x08..0x10], [0xFF; 8]);
        assert_eq!(rom[0x10..0x12], [0xAA, 0xBB]);
    }

    #[test]
    fn conversion_is_deterministic() {
        let image = monitor_image();
        assert_eq!(build_rom(image.clone()).unwrap(), build_rom(image).unwrap());
    }

    #[test]
    fn image_without_code_above_rom_base_is_rejected() {
        let mut image = MemoryImage::new();
        image.insert(0, &BOOT_VECTOR).unwrap();

        assert!(build_rom(image).is_err());
    }
}
