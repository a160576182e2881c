//! Polls a button on a Linux board through /sys/class/gpio.
//!
//! Usage: `sysfs_button [INPUT_PIN] [OUTPUT_PIN] [SECONDS]` (defaults 20, 21, 30)
//!
//! Wire the button between the input line and ground, with the output line as
//! its pull-up source. Needs permission to write `/sys/class/gpio/export`.

use gpio_button::{ButtonDescriptor, PinNumber, SysfsPins};
use std::error::Error;
use std::time::Duration;

fn arg<T: std::str::FromStr>(index: usize, default: T) -> Result<T, Box<dyn Error>> {
    match std::env::args().nth(index) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("argument {} is not a number: {}", index, raw).into()),
        None => Ok(default),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let input: PinNumber = arg(1, 20)?;
    let output: PinNumber = arg(2, 21)?;
    let seconds: u64 = arg(3, 30)?;

    let button = ButtonDescriptor::builder(input, output)
        .polling_rate(100)
        .on_press_down(|| println!("press-down"))
        .on_press_up(|| println!("press-up"))
        .on_long_click(|| println!("long-click"))
        .build()?;

    println!("polling gpio{} (bias gpio{}) for {}s", input, output, seconds);
    let task = gpio_button::start(button, SysfsPins::new())?;
    std::thread::sleep(Duration::from_secs(seconds));
    task.stop()?;
    println!("released gpio{} and gpio{}", output, input);

    Ok(())
}
