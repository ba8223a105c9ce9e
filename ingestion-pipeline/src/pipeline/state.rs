use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    initial: Ready,
    states: [Ready, Stored, Extracted, Chunked, Indexed, Failed],
    events {
        store { transition: { from: Ready, to: Stored } }
        extract { transition: { from: Stored, to: Extracted } }
        chunk { transition: { from: Extracted, to: Chunked } }
        index { transition: { from: Chunked, to: Indexed } }
        reuse { transition: { from: Stored, to: Indexed } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Stored, to: Failed }
            transition: { from: Extracted, to: Failed }
            transition: { from: Chunked, to: Failed }
            transition: { from: Indexed, to: Failed }
        }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
