//! Miscellaneous utility functions to use across modules

/// Print a buffer as hexdump, 16 bytes per line, each line prefixed with its address
pub fn print_multiline_buffer(buffer: &[u8], offset: usize) {
    for line in format_multiline_buffer(buffer, offset) {
        println!("{}", line);
    }
}

fn format_multiline_buffer(buffer: &[u8], offset: usize) -> Vec<String> {
    buffer
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|b| {
                    if b.is_ascii_graphic() || *b == b' ' {
                        *b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:08X}: {:<47}  {}", offset + i * 16, bytes.join(" "), ascii)
        })
        .collect()
}
