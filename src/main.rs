/*!
 * famalloc demo
 *
 * Diagnostics consumer for the page-family memory manager: registers a few
 * families, drives some allocation traffic, and reports what the allocator's
 * introspection interface sees.
 */

use std::error::Error;

use log::info;

use famalloc::{MemoryManager, BLOCK_HEADER_SIZE};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    info!("bringing up page-family memory manager...");
    let mut manager = MemoryManager::with_page_size(4096);
    info!(
        "page size {} bytes, usable capacity {} bytes, header footprint {} bytes",
        manager.page_size(),
        manager.usable_capacity(),
        BLOCK_HEADER_SIZE
    );

    manager.register_family("Employee", 64)?;
    manager.register_family("Invoice", 128)?;
    manager.register_family("Session", 256)?;

    // Some allocation traffic: a burst per family, then punch holes so the
    // report shows splits, coalesced free blocks, and slack.
    let employees: Vec<_> = (0..8)
        .map(|_| manager.allocate("Employee", 1))
        .collect::<Result<_, _>>()?;
    let invoices: Vec<_> = (0..4)
        .map(|_| manager.allocate("Invoice", 2))
        .collect::<Result<_, _>>()?;
    let session = manager.allocate("Session", 3)?;

    manager.write_bytes(employees[0], b"alice")?;
    manager.write_bytes(invoices[0], &1234u32.to_le_bytes())?;

    manager.release(employees[3])?;
    manager.release(employees[4])?;
    manager.release(invoices[1])?;
    manager.release(session)?;

    println!("== registered page families ==");
    for family in manager.families() {
        println!(
            "{:<12} unit size {:>4}  pages {}",
            family.name, family.unit_size, family.page_count
        );
    }

    println!();
    println!("== block layout ==");
    for family in manager.families() {
        println!("family {}:", family.name);
        for page in manager.family_pages(&family.name)? {
            println!("  page @ {:#x}", page.base);
            for block in &page.blocks {
                println!(
                    "    {:<9}  offset {:>5}  size {:>5}",
                    block.state.to_string(),
                    block.offset,
                    block.size
                );
            }
        }
        manager.audit(&family.name)?;
    }

    println!();
    println!("== usage ==");
    for family in manager.families() {
        let usage = manager.family_usage(&family.name)?;
        println!("{}", serde_json::to_string_pretty(&usage)?);
    }

    Ok(())
}
