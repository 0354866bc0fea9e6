use {
    crate::SnoopError,
    wl_snoop::{debugger::Debugger, interactive, passes},
};

pub fn main(
    server_mode: bool,
    skip_first_stop: bool,
    one_by_one: bool,
    pass_names: &[String],
    program: Vec<String>,
) -> Result<(), SnoopError> {
    let debugger = Debugger::new().map_err(SnoopError::Create)?;
    debugger.flags.one_by_one.set(one_by_one);
    for name in pass_names {
        let pass = passes::create(name).ok_or_else(|| SnoopError::UnknownPass(name.clone()))?;
        debugger
            .attach_pass_head(name, pass)
            .map_err(|e| SnoopError::PassInit(name.clone(), e))?;
    }
    interactive::init(&debugger, skip_first_stop).map_err(SnoopError::Interactive)?;
    if server_mode {
        debugger
            .enable_server_mode()
            .map_err(SnoopError::ServerMode)?;
        log::info!("server mode enabled, waiting for clients");
    } else {
        let (program, args) = program.split_first().ok_or(SnoopError::NoProgram)?;
        debugger
            .spawn_client(program, args)
            .map_err(SnoopError::Spawn)?;
    }
    debugger.run().map_err(SnoopError::Run)
}
