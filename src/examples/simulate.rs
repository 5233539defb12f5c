use qkd_link::{summarize, Narrator, Result, SessionBuilder, SessionController};

fn print_new_lines(session: &SessionController, printed: &mut usize) {
    for line in &session.log()[*printed..] {
        println!("  {}", line);
    }
    *printed = session.log().len();
}

fn main() -> Result<()> {
    println!("QKD Link Simulation");
    println!("===================");

    let mut session = SessionBuilder::new().instant().build()?;
    let mut printed = 0;

    session.reset();
    print_new_lines(&session, &mut printed);

    // Unprotected link under attack
    println!("\n[unprotected, drone active]");
    session.start_unsafe(true);
    print_new_lines(&session, &mut printed);
    println!(
        "  -> error rate {:.1}%, secure: {}",
        session.state().error_rate,
        session.state().is_secure
    );

    // Protected link under attack
    println!("\n[QKD protected, drone active]");
    session.start_secure(true);
    print_new_lines(&session, &mut printed);
    println!(
        "  -> phase {}, sifted key {:?}",
        session.state().connection_phase,
        session.state().sifted_key()
    );

    // Beam intersection and a manual renewal
    println!("\n[intersection, then manual renewal]");
    let auto = session.auto_renew();
    let manual = session.renew(true);
    print_new_lines(&session, &mut printed);
    println!("  -> effects {:?} / {:?}", auto.effects, manual.effects);
    println!("  -> renewals: {}", session.state().key_renewal_count);

    println!("\n[analysis]");
    let narrator = narrator();
    let text = summarize(narrator.as_deref(), session.state().last_event.as_ref());
    println!("  {}", text);

    Ok(())
}

#[cfg(feature = "gemini")]
fn narrator() -> Option<Box<dyn Narrator>> {
    qkd_link::GeminiNarrator::from_env()
        .ok()
        .map(|n| Box::new(n) as Box<dyn Narrator>)
}

#[cfg(not(feature = "gemini"))]
fn narrator() -> Option<Box<dyn Narrator>> {
    None
}
