//! FIFO Device CLI Demo
//!
//! Brings up the FIFO instances and drives instance 0 from stdin:
//! every line is written to the device, the line `clear` sends `MEM_CLEAR`,
//! an empty line quits. A blocking reader prints what it receives, and a
//! monitor prints async notifications with the readiness snapshot.
//!
//! Usage: `fifo_demo [config.json]`

use std::sync::Arc;

use chardev::{
    DeviceConfig, DeviceError, FifoDevice, FifoFile, InstanceRegistry, MemNodes, OpenMode,
    MEM_CLEAR,
};
use embedded_io_async::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let bytes = std::fs::read(&path)?;
            DeviceConfig::from_reader(bytes.as_slice())?
        }
        None => DeviceConfig::default(),
    };

    let nodes = Arc::new(MemNodes::new());
    let mut registry = InstanceRegistry::<FifoDevice, _>::initialize(&config, Arc::clone(&nodes))?;
    println!("Devices: {:?}", nodes.node_paths());

    let device = Arc::clone(registry.get(0));
    let writer = device.open(OpenMode::Blocking)?;
    let reader = device.open(OpenMode::Blocking)?;
    let mut monitor = device.open(OpenMode::NonBlocking)?;
    let reader_interrupter = reader.interrupter();

    let reader_task = tokio::spawn(async move {
        read_all("reader", &reader).await;
    });

    let monitor_task = tokio::spawn(async move {
        while let Some(event) = monitor.next_event().await {
            let readiness = monitor.poll();
            println!("(monitor) {event:?}, poll: {readiness} ({:#x})", readiness.mask());
        }
        println!("(monitor) notifications closed");
    });

    write_all(writer).await;

    if !reader_interrupter.interrupt() {
        println!("Reader was busy, interrupt left pending");
    }
    let _ = reader_task.await;

    registry.teardown();
    let _ = monitor_task.await;

    println!("All tasks completed");
    Ok(())
}

async fn write_all(mut writer: FifoFile) {
    println!("Enter text (empty line to quit, 'clear' to reset the buffer):");

    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);
    let mut lines = tokio::io::AsyncBufReadExt::lines(reader);

    while let Ok(Some(line)) = lines.next_line().await {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }

        if trimmed == "clear" {
            if let Err(e) = writer.ioctl(MEM_CLEAR) {
                eprintln!("Clear error: {e} (errno={})", e.errno());
            }
            continue;
        }

        if let Err(e) = Write::write_all(&mut writer, trimmed.as_bytes()).await {
            eprintln!("Write error: {e} (errno={})", e.errno());
            break;
        }
    }

    writer.close();
    println!("Writer closed");
}

async fn read_all(name: &str, reader: &FifoFile) {
    let mut buf = [0u8; 4];

    loop {
        match reader.read(&mut buf).await {
            Ok(n) => {
                let data = String::from_utf8_lossy(&buf[..n]);
                println!("({name}): {data}");
            }
            Err(DeviceError::Interrupted) => {
                println!("({name}) interrupted");
                break;
            }
            Err(e) => {
                eprintln!("({name}) Error: {e} (errno={})", e.errno());
                break;
            }
        }
    }
}
