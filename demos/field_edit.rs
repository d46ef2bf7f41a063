//! Edits single fields of a register and prints the resulting tree

use regsheet::{hl, RegisterMap, Session, Sheet};

fn sheet() -> Sheet {
    let mut sheet = Sheet::new();

    sheet.set(0, 0, "Addr").set(0, 1, "0x01").set(0, 2, "Enable Register");
    sheet.set_row(1, 1, (0..16u32).rev());
    sheet.set_row(2, 1, ["EN_VCM", "EN_TX", "TX_SEL<13:0>"]);
    sheet.set_row(3, 1, [1u32, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0, 1, 0]);
    sheet.merge(2, 3, 2, 16);

    sheet.set(0, 20, "Name").set(0, 24, "Meaning");
    sheet.set(1, 20, "EN_VCM").set(1, 24, "Enable VCM");
    sheet.set(2, 20, "EN_TX").set(2, 24, "Enable TX");

    sheet
}

fn print_tree(session: &Session) -> Result<(), regsheet::Error> {
    for register in session.map() {
        println!("{}", session.register_label(register.key())?);
        for label in session.tree_labels(register.key())? {
            println!("    {}", label);
        }
    }

    Ok(())
}

fn main() -> Result<(), regsheet::Error> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let mut session = Session::new(RegisterMap::build(&sheet()));
    print_tree(&session)?;

    session.select_register("0x01")?;
    session.select_field("EN_TX")?;
    session.edit(1)?;
    session.select_field("TX_SEL130")?;
    let value = session.edit_text("0x1FFF")?;
    println!("\n0x01 is now {} ({})", hl::format_hex(value), hl::format_dec(value));

    print_tree(&session)?;

    Ok(())
}
