mod document_search;
