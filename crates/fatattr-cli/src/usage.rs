use std::io::{self, Write};

pub fn write_version(w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "FAT attributes utility, version {}",
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(w, "Copyright 2013 David Caro Martinez")?;
    writeln!(w)?;
    writeln!(w, "This software comes with ABSOLUTELY NO WARRANTY.")?;
    writeln!(w, "This is free software, and you are welcome to redistribute it")?;
    writeln!(w, "under certain conditions. See the GNU General Public License")?;
    writeln!(w, "for details.")
}

pub fn write_help(w: &mut dyn Write) -> io::Result<()> {
    write_version(w)?;
    writeln!(w, "Usage: fatattr [options] FILE ...")?;
    writeln!(w, "Accepted options:")?;
    for (letter, name) in [
        ('R', "read-only"),
        ('A', "archive"),
        ('S', "system"),
        ('H', "hidden"),
        ('D', "directory"),
        ('V', "volume label"),
    ] {
        let warn = if matches!(letter, 'D' | 'V') {
            " (warning! see below)"
        } else {
            ""
        };
        writeln!(w, "\t+{letter}: Sets the {name} attribute{warn}.")?;
        writeln!(w, "\t-{letter}: Remove the {name} attribute{warn}.")?;
    }
    writeln!(w, "\t--recursive: If FILE is a directory, process it recursively.")?;
    writeln!(w, "\t--verbose: Verbose attribute changes.")?;
    writeln!(w, "\t--help: Show this help.")?;
    writeln!(w, "\t--version: Show only the program name, version and credits.")?;
    writeln!(w, "\t--: Forces all arguments past this one to be interpreted as files.")?;
    writeln!(
        w,
        "If no attribute change is specified, the program prints the file's attributes."
    )?;
    writeln!(
        w,
        "Do NOT use the +D, -D, +V and -V options if you don't know EXACTLY what you are doing."
    )
}
