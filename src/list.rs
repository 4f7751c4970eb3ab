//! List encoding (EXI 7.1.11).
//!
//! Anzahl der Einträge als Unsigned Integer, danach jeder Eintrag gemäß dem
//! Item-Datentyp. Lexikalisch sind die Einträge durch Whitespace getrennt.

use std::io::Read;

use crate::channel::{ChannelReader, ChannelWriter};
use crate::{Error, Result};

/// Obergrenze für decodierte Listenlängen (Schutz vor korrupten Streams).
pub const MAX_LIST_LENGTH: u64 = 1 << 24;

/// Zerlegt die lexikalische Form in ihre Einträge.
pub fn split_items(lexical: &str) -> impl Iterator<Item = &str> {
    lexical.split_ascii_whitespace()
}

/// Schreibt die Anzahl und dann jeden Eintrag über `write_item`.
pub fn write<T, F>(channel: &mut ChannelWriter, items: &[T], mut write_item: F) -> Result<()>
where
    F: FnMut(&mut ChannelWriter, &T) -> Result<()>,
{
    channel.write_unsigned(items.len() as u64);
    for item in items {
        write_item(channel, item)?;
    }
    Ok(())
}

/// Liest die Anzahl und dann jeden Eintrag über `read_item`.
pub fn read<R, T, F>(channel: &mut ChannelReader<R>, mut read_item: F) -> Result<Vec<T>>
where
    R: Read,
    F: FnMut(&mut ChannelReader<R>) -> Result<T>,
{
    let len = channel.read_unsigned()?;
    if len > MAX_LIST_LENGTH {
        return Err(Error::ListLengthOverflow(len));
    }
    let mut items = Vec::with_capacity((len as usize).min(1024));
    for _ in 0..len {
        items.push(read_item(channel)?);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Packing;
    use crate::string;

    #[test]
    fn whitespace_delimited_items() {
        let items: Vec<&str> = split_items("  a\tbb \n ccc ").collect();
        assert_eq!(items, vec!["a", "bb", "ccc"]);
        assert_eq!(split_items("   ").count(), 0);
    }

    #[test]
    fn count_then_items() {
        let items = vec!["foo".to_owned(), "bar".to_owned()];
        let mut w = ChannelWriter::new(Packing::BitPacked);
        write(&mut w, &items, |w, s| {
            string::write(w, s);
            Ok(())
        })
        .unwrap();
        let data = w.into_bytes();
        assert_eq!(data[0], 2);
        let back = read(&mut ChannelReader::new(&data[..], Packing::BitPacked), string::read).unwrap();
        assert_eq!(back, items);
    }

    #[test]
    fn oversized_count_is_rejected() {
        let mut w = ChannelWriter::new(Packing::BitPacked);
        w.write_unsigned(MAX_LIST_LENGTH + 1);
        let data = w.into_bytes();
        let err = read(&mut ChannelReader::new(&data[..], Packing::BitPacked), |r| r.read_bool()).unwrap_err();
        assert_eq!(err, Error::ListLengthOverflow(MAX_LIST_LENGTH + 1));
    }
}
